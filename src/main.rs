fn main() {
    raffle_log_lib::run()
}
