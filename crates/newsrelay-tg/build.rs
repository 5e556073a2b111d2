fn main() {
    vergen::EmitBuilder::builder()
        .build_timestamp()
        .rustc_semver()
        .cargo_target_triple()
        .emit()
        .unwrap();
}
