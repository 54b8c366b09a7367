pub(crate) mod bluetooth;
pub(crate) mod config;
pub(crate) mod data_layer;
pub(crate) mod time;
