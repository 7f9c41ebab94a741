use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read corpus at {path:?}.")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse corpus at {path:?}.")]
	Json {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}
