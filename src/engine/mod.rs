// Pagebot Engine — pagination core plus scheduled-poll add-ons
//
// Leaf-first: platform (outbound seam), parser (content conversion),
// resolver (remote fetch), store (persistence), navigator (interactive
// session state machine), addons (manga + wiki pollers).

pub mod addons;
pub mod navigator;
pub mod parser;
pub mod platform;
pub mod resolver;
pub mod store;
