// Library root
// -----------
// The binary (`main.rs`) wires these modules into a one-shot backup run:
// ask for a caption and token, then copy a "cat says" picture to the disk.
//
// Module responsibilities:
// - `image`: resolves a caption to a picture URL on the image service.
// - `api`: the disk API client (folders, upload by URL, status polling).
// - `backup`: the pipeline tying both together and the JSON records.
// - `config` / `cli`: defaults, command-line options and logging setup.
// - `ui`: prompts, progress bar and the final banner.
pub mod api;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod ui;
