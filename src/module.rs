// Module entry point - enumerates gestures and opens devices by name
//
// One module wraps one driver. The catalog is taken from the driver when
// the module is created and stays fixed for the module's lifetime.

use std::sync::Arc;

use gesture_transport::DEFAULT_CAPACITY;
use tracing::{debug, info};

use crate::config::HalConfig;
use crate::control::ControlDevice;
use crate::data::DataDevice;
use crate::driver::{build_driver, BoxedDriver};
use crate::error::HalError;
use crate::hal::{
    GestureCatalog, GestureDescriptor, DEFAULT_SENSITIVITY, DEVICE_CONTROL, DEVICE_DATA, MODULE_ID,
};

/// A device returned by `GestureModule::open`
pub enum Device {
    Control(ControlDevice),
    Data(DataDevice),
}

impl Device {
    pub fn into_control(self) -> Option<ControlDevice> {
        match self {
            Device::Control(dev) => Some(dev),
            Device::Data(_) => None,
        }
    }

    pub fn into_data(self) -> Option<DataDevice> {
        match self {
            Device::Data(dev) => Some(dev),
            Device::Control(_) => None,
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Control(_) => f.write_str("Device::Control"),
            Device::Data(_) => f.write_str("Device::Data"),
        }
    }
}

pub struct GestureModule {
    driver: BoxedDriver,
    catalog: Arc<GestureCatalog>,
    queue_capacity: usize,
    default_sensitivity: i32,
}

impl GestureModule {
    /// Wrap a driver, building the catalog from the gestures it declares
    pub fn new(driver: BoxedDriver) -> Result<Self, HalError> {
        Self::with_options(driver, DEFAULT_CAPACITY, DEFAULT_SENSITIVITY)
    }

    pub fn with_options(
        driver: BoxedDriver,
        queue_capacity: usize,
        default_sensitivity: i32,
    ) -> Result<Self, HalError> {
        let catalog = GestureCatalog::new(driver.gestures())?;
        info!(
            "Module '{}' ready: {} gestures on '{}' driver",
            MODULE_ID,
            catalog.len(),
            driver.name()
        );
        Ok(Self {
            driver,
            catalog: Arc::new(catalog),
            queue_capacity,
            default_sensitivity,
        })
    }

    /// Build the configured driver and wrap it
    pub fn from_config(config: &HalConfig) -> Result<Self, HalError> {
        let driver = build_driver(config)?;
        Self::with_options(driver, config.queue_capacity, config.default_sensitivity)
    }

    pub fn id(&self) -> &'static str {
        MODULE_ID
    }

    pub fn get_gestures_list(&self) -> &[GestureDescriptor] {
        self.catalog.list()
    }

    pub fn catalog(&self) -> &GestureCatalog {
        &self.catalog
    }

    pub fn driver(&self) -> &BoxedDriver {
        &self.driver
    }

    /// Open a device by name: `"control"` or `"data"`.
    ///
    /// A control device comes back already open, so an unreachable sensor
    /// surfaces here as `HalError::Unavailable`.
    pub fn open(&self, name: &str) -> Result<Device, HalError> {
        debug!("open('{}')", name);
        match name {
            DEVICE_CONTROL => self.open_control().map(Device::Control),
            DEVICE_DATA => Ok(Device::Data(self.open_data())),
            other => Err(HalError::NotFound(format!(
                "no device '{other}' in module '{MODULE_ID}'"
            ))),
        }
    }

    pub fn open_control(&self) -> Result<ControlDevice, HalError> {
        let control = ControlDevice::new(
            Arc::clone(&self.driver),
            Arc::clone(&self.catalog),
            self.queue_capacity,
            self.default_sensitivity,
        );
        control.open()?;
        Ok(control)
    }

    /// A data device not yet attached to any channel
    pub fn open_data(&self) -> DataDevice {
        DataDevice::new()
    }
}
