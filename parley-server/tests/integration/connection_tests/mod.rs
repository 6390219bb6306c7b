mod test_keepalive_ping;
