pub mod colorizer;
pub mod colormap;
pub mod cropper;
pub mod debouncer;
pub mod font;
pub mod frame;
pub mod overlay;
pub mod presenter;
