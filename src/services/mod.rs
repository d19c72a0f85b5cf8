pub mod checkin;
pub mod login;
pub mod otp;
pub mod registration;
pub mod tickets;
