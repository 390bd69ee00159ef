use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::core::v1::NodeAddress;
use thiserror::Error;

/// Node address types, in the vocabulary of `node.status.addresses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Hostname,
    InternalDns,
    InternalIp,
    ExternalDns,
    ExternalIp,
}

/// Default priority: stable names first, external addresses last.
pub const DEFAULT_ADDRESS_TYPES: [AddressType; 5] = [
    AddressType::Hostname,
    AddressType::InternalDns,
    AddressType::InternalIp,
    AddressType::ExternalDns,
    AddressType::ExternalIp,
];

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Hostname => "Hostname",
            AddressType::InternalDns => "InternalDNS",
            AddressType::InternalIp => "InternalIP",
            AddressType::ExternalDns => "ExternalDNS",
            AddressType::ExternalIp => "ExternalIP",
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Hostname" => Ok(AddressType::Hostname),
            "InternalDNS" => Ok(AddressType::InternalDns),
            "InternalIP" => Ok(AddressType::InternalIp),
            "ExternalDNS" => Ok(AddressType::ExternalDns),
            "ExternalIP" => Ok(AddressType::ExternalIp),
            other => Err(format!("unknown node address type {other:?}")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no address matched the configured priority list")]
pub struct NoSuitableAddress;

/// Pick the connect address for a node: the first address whose type appears
/// earliest in the priority list, scanning the priority list outer and the
/// node's addresses inner.
pub fn resolve_address<'a>(
    addresses: &'a [NodeAddress],
    priority: &[AddressType],
) -> Result<&'a str, NoSuitableAddress> {
    for wanted in priority {
        for address in addresses {
            if address.type_ == wanted.as_str() {
                return Ok(&address.address);
            }
        }
    }
    Err(NoSuitableAddress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(type_: &str, address: &str) -> NodeAddress {
        NodeAddress {
            type_: type_.to_string(),
            address: address.to_string(),
        }
    }

    #[test]
    fn priority_list_order_wins_over_node_order() {
        let addresses = [addr("InternalIP", "10.0.0.1"), addr("Hostname", "node1")];
        let resolved = resolve_address(&addresses, &DEFAULT_ADDRESS_TYPES).unwrap();
        assert_eq!(resolved, "node1");
    }

    #[test]
    fn first_matching_address_of_a_type_wins() {
        let addresses = [addr("InternalIP", "10.0.0.1"), addr("InternalIP", "10.0.0.2")];
        let priority = [AddressType::InternalIp];
        assert_eq!(resolve_address(&addresses, &priority).unwrap(), "10.0.0.1");
    }

    #[test]
    fn falls_through_to_later_types() {
        let addresses = [addr("ExternalIP", "1.2.3.4")];
        let resolved = resolve_address(&addresses, &DEFAULT_ADDRESS_TYPES).unwrap();
        assert_eq!(resolved, "1.2.3.4");
    }

    #[test]
    fn no_match_is_an_error() {
        let addresses = [addr("InternalIP", "10.0.0.1")];
        let priority = [AddressType::Hostname];
        assert_eq!(
            resolve_address(&addresses, &priority),
            Err(NoSuitableAddress)
        );
        assert_eq!(
            resolve_address(&[], &DEFAULT_ADDRESS_TYPES),
            Err(NoSuitableAddress)
        );
    }

    #[test]
    fn address_types_round_trip_through_config_strings() {
        for t in DEFAULT_ADDRESS_TYPES {
            assert_eq!(t.as_str().parse::<AddressType>().unwrap(), t);
        }
        assert!("Bogus".parse::<AddressType>().is_err());
    }
}
