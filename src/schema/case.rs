//! Name conversion between local and wire field names.
//!
//! Local names use `snake_case` (`end_port`), the FortiManager API uses
//! hyphenated names (`end-port`).

/// Converts a local name to its wire form.
/// e.g., `"end_port"` -> `"end-port"`
#[must_use]
pub fn to_wire(local: &str) -> String {
    local.replace('_', "-")
}

/// Converts a wire name to its local form.
/// e.g., `"source-ip"` -> `"source_ip"`
#[must_use]
pub fn to_local(wire: &str) -> String {
    wire.replace('-', "_")
}

/// Converts a local resource type name to a CamelCase singleton id.
/// e.g., `"system_fabric_vpn"` -> `"SystemFabricVpn"`
#[must_use]
pub fn to_camel_case(s: &str) -> String {
    s.split('_')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_wire() {
        assert_eq!(to_wire("end_port"), "end-port");
        assert_eq!(to_wire("query_v1_port"), "query-v1-port");
        assert_eq!(to_wire("name"), "name");
    }

    #[test]
    fn test_to_local() {
        assert_eq!(to_local("source-ip"), "source_ip");
        assert_eq!(to_local(&to_wire("ha_direct")), "ha_direct");
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("system_fabric_vpn"), "SystemFabricVpn");
        assert_eq!(to_camel_case("switch_controller_global"), "SwitchControllerGlobal");
    }
}
