/// Shared configuration for conversion runs

/// Progress bar fill characters, coarse to fine
pub const PROGRESS_CHARS: &str = "▉▊▋▌▍▎▏ ";

/// Progress bar segment for indicatif templates
pub const PROGRESS_BAR: &str = "{bar:40.green/blue}";

/// Faces between progress bar refreshes in the mesh pipeline
pub const PROGRESS_UPDATE_INTERVAL: usize = 10_000;

/// Suffix appended to the output path for the run manifest
pub const MANIFEST_SUFFIX: &str = ".json";

/// Upper bound on elements preallocated from counts declared in file headers
pub const HEADER_PREALLOCATION_LIMIT: usize = 1 << 20;
