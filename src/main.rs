fn main() {
    mailbox::uci::run();
}
