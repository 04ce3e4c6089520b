//! Built-in resource descriptor table.
//!
//! Field names follow the FortiOS CLI (`config system snmp community`,
//! `config switch-controller location`, ...). The primary key `id` is
//! exposed locally as `fosid`.

use serde_json::json;

use super::field::FieldDescriptor as F;
use super::resource::{ResourceDescriptor, Scope};

/// Returns all built-in resource descriptors.
#[must_use]
pub fn descriptors() -> Vec<ResourceDescriptor> {
    vec![
        system_snmp_community(),
        firewall_internet_service_addition(),
        system_fabric_vpn(),
        switch_controller_global(),
        wireless_controller_setting(),
        report_layout_body_item(),
        switch_controller_location(),
        switch_controller_location_address_civic(),
        firewall_address(),
    ]
}

fn fosid() -> F {
    F::scalar("fosid").with_wire("id")
}

fn system_snmp_community() -> ResourceDescriptor {
    let host_fields = |ip: &str, source: &str| {
        vec![
            fosid(),
            F::scalar(ip),
            F::scalar(source),
            F::scalar("ha_direct").with_default("disable"),
            F::scalar("host_type").with_default("any"),
            F::list("interface"),
            F::scalar("interface_select_method").with_default("auto"),
        ]
    };

    ResourceDescriptor::keyed("system_snmp_community", "system/snmp/community", "fosid")
        .with_scope(Scope::Global)
        .with_description("SNMP community configuration")
        .field(fosid().required())
        .field(F::scalar("name").required())
        .field(F::scalar("status").with_default("enable"))
        .field(F::set("events"))
        .field(F::table("hosts", host_fields("ip", "source_ip")))
        .field(F::table("hosts6", host_fields("ipv6", "source_ipv6")))
        .field(F::scalar("mib_view"))
        .field(F::scalar("query_v1_status").with_default("enable"))
        .field(F::scalar("query_v1_port").with_default(161))
        .field(F::scalar("query_v2c_status").with_default("enable"))
        .field(F::scalar("query_v2c_port").with_default(161))
        .field(F::scalar("trap_v1_status").with_default("enable"))
        .field(F::scalar("trap_v1_lport").with_default(162))
        .field(F::scalar("trap_v1_rport").with_default(162))
        .field(F::scalar("trap_v2c_status").with_default("enable"))
        .field(F::scalar("trap_v2c_lport").with_default(162))
        .field(F::scalar("trap_v2c_rport").with_default(162))
        .field(F::set("vdoms"))
}

fn firewall_internet_service_addition() -> ResourceDescriptor {
    ResourceDescriptor::keyed(
        "firewall_internet_service_addition",
        "firewall/internet-service-addition",
        "fosid",
    )
    .with_description("Internet Service addition entries")
    .field(fosid().required())
    .field(F::scalar("comment"))
    .field(F::table(
        "entry",
        vec![
            fosid(),
            F::scalar("addr_mode").with_default("ipv4"),
            F::scalar("protocol").with_default(0),
            F::table(
                "port_range",
                vec![fosid(), F::scalar("start_port"), F::scalar("end_port")],
            ),
        ],
    ))
}

fn system_fabric_vpn() -> ResourceDescriptor {
    ResourceDescriptor::settings("system_fabric_vpn", "system/fabric-vpn")
        .with_scope(Scope::Global)
        .with_description("Fabric VPN overlay settings")
        .field(F::scalar("status").with_default("disable"))
        .field(F::scalar("sync_mode").with_default("enable"))
        .field(F::scalar("branch_name"))
        .field(F::scalar("policy_rule").with_default("health-check"))
        .field(F::scalar("vpn_role").with_default("hub"))
        .field(F::list("loopback_address_block"))
        .field(F::list("loopback_interface"))
        .field(F::scalar("loopback_advertised_subnet"))
        .field(F::set("psksecret"))
        .field(F::scalar("bgp_as"))
        .field(F::list("sdwan_zone"))
        .field(F::set("health_checks"))
        .field(F::table(
            "overlays",
            vec![
                F::scalar("name").required(),
                F::scalar("ipsec_network_id"),
                F::list("overlay_tunnel_block"),
                F::scalar("remote_gw"),
                F::scalar("bgp_neighbor"),
                F::scalar("bgp_neighbor_group"),
                F::scalar("bgp_neighbor_range"),
                F::scalar("bgp_network"),
                F::list("interface"),
                F::scalar("overlay_policy"),
                F::list("sdwan_member"),
            ],
        ))
        .field(F::table(
            "advertised_subnets",
            vec![
                fosid(),
                F::list("prefix"),
                F::scalar("access").with_default("inbound"),
                F::scalar("bgp_network"),
                F::list("firewall_address"),
                F::set("policies"),
            ],
        ))
}

fn switch_controller_global() -> ResourceDescriptor {
    ResourceDescriptor::settings("switch_controller_global", "switch-controller/global")
    .with_description("FortiSwitch global settings")
    .field(F::scalar("mac_aging_interval").with_default(300))
    .field(F::scalar("https_image_push").with_default("enable"))
    .field(F::scalar("vlan_all_mode").with_default("defined"))
    .field(F::scalar("vlan_optimization").with_default("configured"))
    .field(F::set("disable_discovery"))
    .field(F::scalar("mac_retention_period").with_default(24))
    .field(F::scalar("default_virtual_switch_vlan"))
    .field(F::scalar("dhcp_server_access_list").with_default("disable"))
    .field(F::scalar("log_mac_limit_violations").with_default("disable"))
    .field(F::scalar("sn_dns_resolution").with_default("enable"))
    .field(F::scalar("mac_event_logging").with_default("disable"))
    .field(F::scalar("bounce_quarantined_link").with_default("disable"))
    .field(F::scalar("quarantine_mode").with_default("by-vlan"))
    .field(F::set("update_user_device"))
    .field(F::table(
        "custom_command",
        vec![F::scalar("command_entry").required(), F::list("command_name")],
    ))
    .field(F::scalar("fips_enforce").with_default("enable"))
    .field(F::scalar("firmware_provision_on_authorization").with_default("disable"))
    .field(F::scalar("switch_on_deauth").with_default("no-op"))
}

fn wireless_controller_setting() -> ResourceDescriptor {
    ResourceDescriptor::settings("wireless_controller_setting", "wireless-controller/setting")
    .with_description("Wireless controller VDOM settings")
    .field(F::scalar("account_id"))
    .field(F::scalar("country").with_default("US"))
    .field(F::scalar("duplicate_ap_detection").with_default("enable"))
    .field(F::scalar("fapc_compatibility").with_default("disable"))
    .field(F::scalar("wfa_compatibility").with_default("disable"))
    .field(F::scalar("phishing_ssid_detect").with_default("enable"))
    .field(F::set("fake_ssid_action"))
    .field(F::table(
        "offending_ssid",
        vec![fosid(), F::scalar("ssid_pattern"), F::set("action")],
    ))
    .field(F::scalar("device_weight").with_default(1))
    .field(F::scalar("device_holdoff").with_default(5))
    .field(F::scalar("device_idle").with_default(1440))
    .field(F::scalar("firmware_provision_on_authorization").with_default("disable"))
    .field(F::scalar("rolling_wtp_upgrade").with_default("disable"))
    .field(F::scalar("darrp_optimize").with_default(86400))
    .field(F::set("darrp_optimize_schedules"))
}

fn report_layout_body_item() -> ResourceDescriptor {
    ResourceDescriptor::keyed(
        "report_layout_body_item",
        "report/layout/{layout}/body-item",
        "fosid",
    )
    .with_parent("layout")
    .with_description("Body items of a report layout")
    .field(fosid().required())
    .field(F::scalar("description"))
    .field(F::scalar("type").with_default("text"))
    .field(F::scalar("style"))
    .field(F::scalar("top_n").with_default(0))
    .field(F::scalar("hide").with_default("disable"))
    .field(F::scalar("chart"))
    .field(F::set("chart_options"))
    .field(F::scalar("drill_down_items"))
    .field(F::scalar("column").with_default(0))
    .field(F::scalar("title"))
    .field(F::scalar("text_component").with_default("text"))
    .field(F::scalar("content"))
    .field(F::scalar("img_src"))
    .field(F::scalar("list_component").with_default("bullet"))
    .field(F::table("list", vec![fosid(), F::scalar("content")]))
    .field(F::table(
        "parameters",
        vec![fosid(), F::scalar("name"), F::scalar("value")],
    ))
}

fn civic_fields() -> Vec<F> {
    [
        "additional",
        "additional_code",
        "block",
        "branch_road",
        "building",
        "city",
        "city_division",
        "country",
        "country_subdivision",
        "county",
        "direction",
        "floor",
        "landmark",
        "language",
        "name",
        "number",
        "number_suffix",
        "parent_key",
        "place_type",
        "post_office_box",
        "postal_community",
        "primary_road",
        "road_section",
        "room",
        "script",
        "seat",
        "street",
        "street_suffix",
        "trailing_str_suffix",
        "unit",
        "zip",
    ]
    .into_iter()
    .map(|name| F::scalar(name))
    .collect()
}

fn switch_controller_location() -> ResourceDescriptor {
    ResourceDescriptor::keyed("switch_controller_location", "switch-controller/location", "name")
        .with_description("FortiSwitch location services")
        .field(F::scalar("name").required())
        .field(F::block("address_civic", civic_fields()))
        .field(F::block(
            "coordinates",
            vec![
                F::scalar("altitude"),
                F::scalar("altitude_unit").with_default("m"),
                F::scalar("datum").with_default("WGS84"),
                F::scalar("latitude"),
                F::scalar("longitude"),
                F::scalar("parent_key"),
            ],
        ))
        .field(F::block(
            "elin_number",
            vec![F::scalar("elin_num"), F::scalar("parent_key")],
        ))
}

fn switch_controller_location_address_civic() -> ResourceDescriptor {
    let mut desc = ResourceDescriptor::settings(
        "switch_controller_location_address_civic",
        "switch-controller/location/{location}/address-civic",
    )
    .with_parent("location")
    .with_description("Civic address of a FortiSwitch location");
    desc.fields = civic_fields();
    desc
}

fn firewall_address() -> ResourceDescriptor {
    ResourceDescriptor::keyed("firewall_address", "firewall/address", "name")
        .with_scope(Scope::Adom)
        .with_description("IPv4 address objects")
        .field(F::scalar("name").required())
        .field(F::scalar("type").with_default("ipmask"))
        .field(F::list("subnet"))
        .field(F::scalar("start_ip"))
        .field(F::scalar("end_ip"))
        .field(F::scalar("fqdn"))
        .field(F::scalar("comment"))
        .field(F::scalar("color").with_default(json!(0)))
        .field(F::list("associated_interface"))
        .field(F::scalar("allow_routing").with_default("disable"))
        .field(F::table("list", vec![F::scalar("ip").required()]))
        .field(F::table(
            "tagging",
            vec![F::scalar("name"), F::scalar("category"), F::set("tags")],
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_descriptors_are_valid() {
        for desc in descriptors() {
            assert!(desc.validate().is_ok(), "{} is invalid", desc.name);
        }
    }

    #[test]
    fn test_builtin_names_are_unique() {
        let all = descriptors();
        let names: HashSet<_> = all.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn test_fosid_maps_to_wire_id() {
        let desc = system_snmp_community();
        assert_eq!(desc.key_field().unwrap().wire_name(), "id");
    }
}
