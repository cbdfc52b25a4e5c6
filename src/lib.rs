// Gesture HAL - Shared Library
// Gesture catalog, control/data devices, drivers and the event stream

pub mod activation;
pub mod config;
pub mod control;
pub mod data;
pub mod driver;
pub mod error;
pub mod hal;
pub mod module;
pub mod stream;

pub use activation::{Activation, ActivationSet, Toggle};
pub use config::{default_config_path, DriverConfig, GestureEntry, HalConfig};
pub use control::{ControlDevice, ControlState};
pub use data::DataDevice;
pub use driver::{
    build_driver, BoxedDriver, Capabilities, Delivery, EventSink, GestureDriver, HidDriver,
    ReplayDriver, SimulatedDriver,
};
pub use error::HalError;
pub use hal::{builtin_gestures, GestureCatalog, GestureDescriptor, HandleRegistry};
pub use module::{Device, GestureModule};
pub use stream::EventStream;

pub use gesture_transport::{
    ChannelHandle, ChannelToken, GestureEvent, GestureHandle, GestureRecord, GestureType,
    GestureVector, PollOutcome, SensorType, WAKE_SENTINEL,
};
