//! Bus scanning in the manner of `i2cdetect`.
//!
//! Each address is probed with a Quick Write, except the ranges where that is
//! known to corrupt EEPROMs or lock up some chips (0x30-0x37, 0x50-0x5F); those
//! get a Receive Byte instead.

use linux_smbus::{BusHandle, Error, Result, SmbusClient};

/// Outcome of probing one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Device acknowledged.
    Present,
    /// No acknowledgement.
    Absent,
    /// Address claimed by a kernel driver.
    Busy,
}

fn prefers_read(address: u8) -> bool {
    matches!(address, 0x30..=0x37 | 0x50..=0x5f)
}

/// Probe a single address. The client is left targeting `address`.
pub fn probe<B: BusHandle>(client: &mut SmbusClient<B>, address: u8) -> Result<Probe> {
    match client.set_address(address) {
        Ok(()) => {}
        Err(e @ Error::AddressRejected { .. }) if e.errno() == Some(libc::EBUSY) => {
            return Ok(Probe::Busy)
        }
        Err(e) => return Err(e),
    }

    let result = if prefers_read(address) {
        client.read_byte().map(drop)
    } else {
        client.write_quick(false)
    };

    match result {
        Ok(()) => Ok(Probe::Present),
        Err(Error::TransactionFailed(_)) => Ok(Probe::Absent),
        Err(e) => Err(e),
    }
}

/// Probe every address in `first..=last`.
pub fn scan<B: BusHandle>(
    client: &mut SmbusClient<B>,
    first: u8,
    last: u8,
) -> Result<Vec<(u8, Probe)>> {
    (first..=last)
        .map(|address| probe(client, address).map(|p| (address, p)))
        .collect()
}

/// Render results as the familiar 16-column grid.
pub fn format_table(results: &[(u8, Probe)]) -> String {
    let mut out = String::from("     0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f\n");
    for row in (0u8..0x80).step_by(16) {
        out.push_str(&format!("{:02x}:", row));
        for col in 0..16u8 {
            let address = row + col;
            let cell = match results.iter().find(|(a, _)| *a == address) {
                Some((_, Probe::Present)) => format!("{:02x}", address),
                Some((_, Probe::Absent)) => "--".to_string(),
                Some((_, Probe::Busy)) => "UU".to_string(),
                None => "  ".to_string(),
            };
            out.push(' ');
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use linux_smbus::{BusAddress, Functionality, ProtocolSize, Transaction};
    use std::io;
    use std::sync::{Arc, Mutex};

    type SizeLog = Arc<Mutex<Vec<(u8, ProtocolSize)>>>;

    /// Bus with devices at fixed addresses and one driver-claimed address.
    struct ScanBus {
        present: Vec<u8>,
        busy: u8,
        current: u8,
        sizes: SizeLog,
    }

    impl BusHandle for ScanBus {
        fn select_address(&mut self, address: BusAddress) -> io::Result<()> {
            if address.as_u8() == self.busy {
                return Err(io::Error::from_raw_os_error(libc::EBUSY));
            }
            self.current = address.as_u8();
            Ok(())
        }

        fn submit(&mut self, txn: &mut Transaction) -> io::Result<()> {
            self.sizes.lock().unwrap().push((self.current, txn.size));
            if self.present.contains(&self.current) {
                Ok(())
            } else {
                Err(io::Error::from_raw_os_error(libc::ENXIO))
            }
        }

        fn functionality(&mut self) -> io::Result<Functionality> {
            Ok(Functionality::all())
        }
    }

    fn client() -> (SmbusClient<ScanBus>, SizeLog) {
        let sizes = SizeLog::default();
        let bus = ScanBus {
            present: vec![0x24, 0x4c, 0x50],
            busy: 0x36,
            current: 0,
            sizes: sizes.clone(),
        };
        (SmbusClient::new(bus, 0x08).unwrap(), sizes)
    }

    #[test]
    fn test_scan_classifies_addresses() {
        let (mut client, _sizes) = client();
        let results = scan(&mut client, 0x20, 0x5f).unwrap();

        let lookup = |a: u8| results.iter().find(|(x, _)| *x == a).unwrap().1;
        assert_eq!(lookup(0x24), Probe::Present);
        assert_eq!(lookup(0x4c), Probe::Present);
        assert_eq!(lookup(0x50), Probe::Present);
        assert_eq!(lookup(0x36), Probe::Busy);
        assert_eq!(lookup(0x25), Probe::Absent);
        assert_eq!(results.len(), 0x40);
    }

    #[test]
    fn test_eeprom_range_probed_with_read() {
        let (mut client, sizes) = client();
        probe(&mut client, 0x50).unwrap();
        probe(&mut client, 0x4c).unwrap();

        assert_eq!(
            *sizes.lock().unwrap(),
            vec![(0x50, ProtocolSize::Byte), (0x4c, ProtocolSize::Quick)]
        );
    }

    #[test]
    fn test_busy_address_does_not_poison_later_probes() {
        let (mut client, _sizes) = client();
        assert_eq!(probe(&mut client, 0x36).unwrap(), Probe::Busy);
        assert_eq!(probe(&mut client, 0x24).unwrap(), Probe::Present);
    }

    #[test]
    fn test_scan_starting_on_claimed_address() {
        let sizes = SizeLog::default();
        let bus = ScanBus {
            present: vec![0x37],
            busy: 0x36,
            current: 0,
            sizes: sizes.clone(),
        };
        let mut client = SmbusClient::deferred(bus, BusAddress::new(0x36).unwrap());

        let results = scan(&mut client, 0x36, 0x38).unwrap();
        assert_eq!(
            results,
            vec![(0x36, Probe::Busy), (0x37, Probe::Present), (0x38, Probe::Absent)]
        );
    }

    #[test]
    fn test_format_table() {
        let table = format_table(&[(0x24, Probe::Present), (0x25, Probe::Absent), (0x36, Probe::Busy)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[3].starts_with("20:"));
        assert!(lines[3].contains("24 --"));
        assert!(lines[4].contains("UU"));
    }
}
