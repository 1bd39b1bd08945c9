pub mod payment;
pub mod shop;
pub mod reminder;
pub mod settings;

pub use payment::*;
pub use shop::*;
pub use reminder::*;
pub use settings::*;
