// Build script for example-service
// Generates the example.Example server and client without a .proto file:
// both methods take and return google.protobuf.Empty, aliased to () as
// `proto::Empty` in src/lib.rs
fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let unary = |name: &str, route_name: &str| {
        tonic_build::manual::Method::builder()
            .name(name)
            .route_name(route_name)
            .input_type("super::Empty")
            .output_type("super::Empty")
            .codec_path("tonic::codec::ProstCodec")
            .build()
    };

    let service = tonic_build::manual::Service::builder()
        .name("Example")
        .package("example")
        .method(unary("get_service_value", "GetServiceValue"))
        .method(unary("set_service_value", "SetServiceValue"))
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
