pub mod drawing;
pub mod pages;
pub mod proxy;
pub mod question;
