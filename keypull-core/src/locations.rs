//! Well-known keystore and keybox locations on Android devices.

/// Paths tried when no locations are supplied.
pub const DEVICE_LOCATIONS: &[&str] = &[
    "/data/misc/keystore/",
    "/data/misc/keystore/user_0/",
    "/data/misc/keystore/persistent.sqlite",
    "/data/adb/tricky_store/keybox.xml",
    "/mnt/vendor/keystore/",
    "/system/etc/security/keystore/",
    "/vendor/etc/keystore/",
];

/// The default location list as owned strings.
pub fn default_locations() -> Vec<String> {
    DEVICE_LOCATIONS.iter().map(|l| l.to_string()).collect()
}
