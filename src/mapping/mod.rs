pub mod cycle;
pub mod evidence;
pub mod hooper;
