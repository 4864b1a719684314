mod helpers;
mod meal;
mod today;

pub(crate) use meal::{cmd_add, cmd_delete};
pub(crate) use today::cmd_today;
