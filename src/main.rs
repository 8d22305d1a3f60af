fn main() {
    clicktally_lib::run()
}
