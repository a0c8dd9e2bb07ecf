//! Reference configuration for an NCS1002 optical platform.
//!
//! Three sensor groups, sampled every 30 minutes, 20 seconds and 10 seconds
//! by subscriptions 100, 200 and 300.

use crate::builder::{GroupSpec, SubscriptionSpec, build};
use crate::error::ValidationError;
use crate::tree::ConfigurationTree;

/// Inventory: chassis serial numbers.
pub const PATH1: &str = "Cisco-IOS-XR-plat-chas-invmgr-oper:platform-inventory/racks/rack/attributes/basic-info";

/// Inventory: pluggable serial numbers and firmware.
pub const PATH2: &str = "Cisco-IOS-XR-plat-chas-invmgr-oper:platform-inventory/racks/rack/slots/slot/cards/card/port-slots/port-slot/portses/ports/hw-components/hw-component/attributes/basic-info";

/// Active system alarms.
pub const PATH10: &str = "Cisco-IOS-XR-alarmgr-server-oper:alarms/brief/brief-card/brief-locations/brief-location/active";

/// System memory summary.
pub const PATH11: &str = "Cisco-IOS-XR-nto-misc-oper:memory-summary/nodes/node/summary";

/// CPU utilization.
pub const PATH12: &str = "Cisco-IOS-XR-wdsysmon-fd-oper:system-monitoring/cpu-utilization";

/// coherentDSP 30-second FEC counters.
pub const PATH20: &str = "Cisco-IOS-XR-pmengine-oper:performance-management/otu/otu-ports/otu-port/otu-current/otu-second30/otu-second30fecs/otu-second30fec";

/// coherentDSP 30-second OTN counters.
pub const PATH21: &str = "Cisco-IOS-XR-pmengine-oper:performance-management/otu/otu-ports/otu-port/otu-current/otu-second30/otu-second30otns/otu-second30otn";

/// hundredGigE controller 30-second ethernet counters.
pub const PATH22: &str = "Cisco-IOS-XR-pmengine-oper:performance-management/ethernet/ethernet-ports/ethernet-port/ethernet-current/ethernet-second30/second30-ethers/second30-ether";

/// Optics controller 30-second counters.
pub const PATH23: &str = "Cisco-IOS-XR-pmengine-oper:performance-management/optics/optics-ports/optics-port/optics-current/optics-second30/optics-second30-optics/optics-second30-optic";

/// Optics summary.
pub const PATH24: &str = "Cisco-IOS-XR-controller-optics-oper-sub1:optics-oper/optics-ports/optics-port/optics-info";

pub const PATH_LONG: [&str; 2] = [PATH1, PATH2];
pub const PATH_MED: [&str; 3] = [PATH10, PATH11, PATH12];
pub const PATH_SHORT: [&str; 5] = [PATH20, PATH21, PATH22, PATH23, PATH24];

pub const SGROUP1_ID: &str = "SGROUP1";
pub const SGROUP2_ID: &str = "SGROUP2";
pub const SGROUP3_ID: &str = "SGROUP3";

pub const SGROUP1_INTERVAL_MS: u64 = 1_800_000;
pub const SGROUP2_INTERVAL_MS: u64 = 20_000;
pub const SGROUP3_INTERVAL_MS: u64 = 10_000;

pub const SUBS1_ID: u64 = 100;
pub const SUBS2_ID: u64 = 200;
pub const SUBS3_ID: u64 = 300;

pub fn groups() -> Vec<GroupSpec> {
    vec![
        GroupSpec::new(SGROUP1_ID, PATH_LONG),
        GroupSpec::new(SGROUP2_ID, PATH_MED),
        GroupSpec::new(SGROUP3_ID, PATH_SHORT),
    ]
}

pub fn subscriptions() -> Vec<SubscriptionSpec> {
    vec![
        SubscriptionSpec::new(SUBS1_ID, SGROUP1_ID, SGROUP1_INTERVAL_MS),
        SubscriptionSpec::new(SUBS2_ID, SGROUP2_ID, SGROUP2_INTERVAL_MS),
        SubscriptionSpec::new(SUBS3_ID, SGROUP3_ID, SGROUP3_INTERVAL_MS),
    ]
}

/// Build the reference tree.
pub fn tree() -> Result<ConfigurationTree, ValidationError> {
    build(&groups(), &subscriptions())
}
