fn main() -> std::io::Result<()> {
    taas_lib::run()
}
