fn main() {
    text_reader_lib::run()
}
