// Jobs module - background tasks

pub mod set_refresher;
