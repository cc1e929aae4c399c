//! Messages and clients generated from `proto/inference.proto`.

tonic::include_proto!("lumi.inference");
