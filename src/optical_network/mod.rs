// elastic optical network, each link a grid of frequency slots
// circuits take the same contiguous slots on every link of their route
// and are only admitted when the signal quality of everyone stays acceptable

pub mod circuit;
pub mod composer;
pub mod control_plane;
pub mod mesh;
pub mod modulation;
pub mod route;
pub mod spectrum;
pub mod transponder;
