fn main() {
    irodori::start();
}
