use std::io::BufRead;

/// Represents network statistics for a single interface, as reported in `/proc/net/dev`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct NetworkStat {
    /// Interface name.
    pub name: String,

    /// Bytes received.
    pub rx_bytes: u64,
    /// Packets received.
    pub rx_packets: u64,
    /// Receive errors.
    pub rx_errs: u64,
    /// Dropped packets while receiving.
    pub rx_drop: u64,

    /// Bytes transmitted.
    pub tx_bytes: u64,
    /// Packets transmitted.
    pub tx_packets: u64,
    /// Transmit errors.
    pub tx_errs: u64,
    /// Dropped packets while transmitting.
    pub tx_drop: u64,
}

/// Splits a `/proc/net/dev` data line into the interface name and its counters.
fn parse_interface_line(line: &str) -> Option<(&str, impl Iterator<Item = &str>)> {
    let (iface, data) = line.trim().split_once(':')?;
    Some((iface.trim(), data.split_whitespace()))
}

/// Builds a [`NetworkStat`] from the 16 counters following the interface name.
///
/// Unparsable values count as zero; fewer than 16 fields yields `None`.
fn stats_from_fields<'a>(
    name: &str,
    mut fields: impl Iterator<Item = &'a str>,
) -> Option<NetworkStat> {
    let mut next = || -> Option<u64> { Some(fields.next()?.parse().unwrap_or(0)) };

    let rx_bytes = next()?;
    let rx_packets = next()?;
    let rx_errs = next()?;
    let rx_drop = next()?;
    // fifo, frame, compressed, multicast
    for _ in 0..4 {
        next()?;
    }
    let tx_bytes = next()?;
    let tx_packets = next()?;
    let tx_errs = next()?;
    let tx_drop = next()?;
    // fifo, colls, carrier, compressed
    for _ in 0..4 {
        next()?;
    }

    Some(NetworkStat {
        name: name.to_string(),
        rx_bytes,
        rx_packets,
        rx_errs,
        rx_drop,
        tx_bytes,
        tx_packets,
        tx_errs,
        tx_drop,
    })
}

impl NetworkStat {
    /// Reads `/proc/net/dev` formatted data and returns the counters of `iface`.
    ///
    /// The first two lines are headers. Returns `Ok(None)` if the interface is
    /// not listed or its line is malformed.
    pub fn for_interface<R: BufRead>(buf: &mut R, iface: &str) -> std::io::Result<Option<Self>> {
        let mut line = String::new();

        for _ in 0..2 {
            buf.read_line(&mut line)?;
            line.clear();
        }

        while buf.read_line(&mut line)? != 0 {
            if let Some((name, fields)) = parse_interface_line(&line) {
                if name == iface {
                    return Ok(stats_from_fields(name, fields));
                }
            }
            line.clear();
        }

        Ok(None)
    }

    /// Returns the counters seen from the other end of a point-to-point link.
    ///
    /// Counters of the host side of a veth pair describe the container side
    /// with receive and transmit exchanged.
    pub fn swapped(self) -> Self {
        NetworkStat {
            name: self.name,
            rx_bytes: self.tx_bytes,
            rx_packets: self.tx_packets,
            rx_errs: self.tx_errs,
            rx_drop: self.tx_drop,
            tx_bytes: self.rx_bytes,
            tx_packets: self.rx_packets,
            tx_errs: self.rx_errs,
            tx_drop: self.rx_drop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
";

    #[test]
    fn test_empty_input() {
        let stat = NetworkStat::for_interface(&mut &b""[..], "eth0").unwrap();
        assert_eq!(stat, None);
    }

    #[test]
    fn test_only_headers() {
        let stat = NetworkStat::for_interface(&mut HEADERS.as_bytes(), "eth0").unwrap();
        assert_eq!(stat, None);
    }

    #[test]
    fn test_parse_selected_interface() {
        let data = format!(
            "{HEADERS}    lo: 422198341   75815    0    0    0     0          0         0 422198341   75815    0    0    0     0       0          0
  eth0: 10240    100     1    2    0     0          0         0  20480   200     3    4    0     0       0          0
"
        );
        let stat = NetworkStat::for_interface(&mut data.as_bytes(), "eth0")
            .unwrap()
            .unwrap();
        assert_eq!(stat.name, "eth0");
        assert_eq!(stat.rx_bytes, 10240);
        assert_eq!(stat.rx_packets, 100);
        assert_eq!(stat.rx_errs, 1);
        assert_eq!(stat.rx_drop, 2);
        assert_eq!(stat.tx_bytes, 20480);
        assert_eq!(stat.tx_packets, 200);
        assert_eq!(stat.tx_errs, 3);
        assert_eq!(stat.tx_drop, 4);
    }

    #[test]
    fn test_interface_prefix_does_not_match() {
        let data = format!("{HEADERS}  eth01: 1 1 0 0 0 0 0 0 1 1 0 0 0 0 0 0\n");
        let stat = NetworkStat::for_interface(&mut data.as_bytes(), "eth0").unwrap();
        assert_eq!(stat, None);
    }

    #[test]
    fn test_malformed_line_too_few_fields() {
        let data = format!("{HEADERS} badif: 123 456\n");
        let stat = NetworkStat::for_interface(&mut data.as_bytes(), "badif").unwrap();
        assert_eq!(stat, None);
    }

    #[test]
    fn test_unparsable_values() {
        let data = format!("{HEADERS}  eth0: xyz abc 0 0 0 0 0 0  20480 200 0 0 0 0 0 0\n");
        let stat = NetworkStat::for_interface(&mut data.as_bytes(), "eth0")
            .unwrap()
            .unwrap();
        assert_eq!(stat.rx_bytes, 0);
        assert_eq!(stat.rx_packets, 0);
        assert_eq!(stat.tx_bytes, 20480);
        assert_eq!(stat.tx_packets, 200);
    }

    #[test]
    fn test_swapped_exchanges_directions() {
        let stat = NetworkStat {
            name: "veth1".to_string(),
            rx_bytes: 1,
            rx_packets: 2,
            rx_errs: 3,
            rx_drop: 4,
            tx_bytes: 10,
            tx_packets: 20,
            tx_errs: 30,
            tx_drop: 40,
        };
        let swapped = stat.swapped();
        assert_eq!(swapped.name, "veth1");
        assert_eq!(swapped.rx_bytes, 10);
        assert_eq!(swapped.rx_drop, 40);
        assert_eq!(swapped.tx_bytes, 1);
        assert_eq!(swapped.tx_errs, 3);
    }
}
