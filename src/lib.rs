pub mod app;
pub mod appsettings;
pub mod cache;
pub mod clock;
pub mod delivery;
pub mod models;
pub mod providers;
pub mod scheduling;
pub mod storage;
pub mod timetable;
