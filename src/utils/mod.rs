pub mod http_client;

#[cfg(test)]
pub mod test_server;
