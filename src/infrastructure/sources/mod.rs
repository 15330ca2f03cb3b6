mod google_drive;
mod local;

pub use google_drive::GoogleDriveSource;
pub use local::LocalFileSource;
