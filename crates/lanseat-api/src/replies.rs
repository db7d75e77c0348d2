//! Embed colours and the small reply builders shared by every handler.

use lanseat_types::api::{Embed, Reply};

pub mod colors {
    pub const INFO: u32 = 0x0089E4;
    pub const ERROR: u32 = 0xDD3601;
    pub const CONFIRM: u32 = 0xFFA500;
    pub const SUCCESS: u32 = 0x2DCC20;
    pub const CONGRATS: u32 = 0x28B81C;
    pub const CURRENT: u32 = 0x00AE86;
    pub const PARTICIPANTS: u32 = 7907404;
    pub const RESERVES: u32 = 11027200;
}

pub fn info(title: &str, description: &str) -> Reply {
    Reply::embed(Embed::new(title, colors::INFO).description(description))
}

pub fn error(title: &str, description: &str) -> Reply {
    Reply::embed(Embed::new(title, colors::ERROR).description(description))
}

pub fn success(title: &str, description: &str) -> Reply {
    Reply::embed(Embed::new(title, colors::SUCCESS).description(description))
}
