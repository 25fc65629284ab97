pub mod devices;
pub mod grant;
pub mod output;
pub mod run;
pub mod status;
pub mod test_webhook;
