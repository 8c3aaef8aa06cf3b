mod e2e_test;
mod store_test;
mod stream_test;
mod support;
