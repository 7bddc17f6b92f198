pub mod trade_poller;
