fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generator and Embedder clients for the inference sidecar
    tonic_build::compile_protos("../../proto/inference.proto")?;
    Ok(())
}
