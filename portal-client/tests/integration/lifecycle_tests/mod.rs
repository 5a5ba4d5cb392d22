mod test_send_message;
mod test_teardown_order;
