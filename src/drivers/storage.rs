// TWatch - SPIFFS mount
//
// Registers the SPIFFS data partition with the ESP-IDF VFS so the
// configuration files are reachable through `std::fs` under
// `SPIFFS_BASE_PATH`.

use esp_idf_sys::esp;

use crate::config::*;

pub fn mount_spiffs() -> anyhow::Result<()> {
    let conf = esp_idf_sys::esp_vfs_spiffs_conf_t {
        base_path: SPIFFS_BASE_PATH_C.as_ptr(),
        partition_label: core::ptr::null(),
        max_files: SPIFFS_MAX_FILES,
        format_if_mount_failed: true,
    };

    // SAFETY: `conf` and the static path outlive the call; ESP-IDF copies
    // what it keeps.
    unsafe { esp!(esp_idf_sys::esp_vfs_spiffs_register(&conf))? };

    log::info!("SPIFFS mounted at {}", SPIFFS_BASE_PATH);
    Ok(())
}
