//! Track upcoming TV episodes and movie releases, encode how close they are,
//! and schedule calendar reminders for the ones that are due.

pub mod calendar;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod ics;
pub mod model;
pub mod proximity;
pub mod status;
pub mod tmdb;
pub mod tracker;
