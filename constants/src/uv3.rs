/// Size of one UV3 record: three f64 coordinates then type, red, green, blue
pub const UV3_RECORD_SIZE: usize = 28;

/// Primitive tag of an independent point
pub const UV3_POINT: u8 = 1;

/// Primitive tag of a line vertex
pub const UV3_LINE: u8 = 2;

/// Primitive tag of a triangle vertex
pub const UV3_TRIANGLE: u8 = 3;

/// Colour written for missing data, matching the viewer background
pub const BACKGROUND_COLOUR: [u8; 3] = [7, 10, 12];

/// Default colour of mesh triangles
pub const MESH_COLOUR: [u8; 3] = [173, 73, 74];
