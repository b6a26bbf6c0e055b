pub mod config;
pub mod media;
pub mod utils;

pub use media::{
    AssetDescriptor, AssetKind, MediaPicker, MediaTypeFilter, OpenFileBrowserOptions,
    PickerError, SelectionOptions, SelectionResult,
};
