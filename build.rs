fn main() {
    // The profile-service proto bindings are checked in as a static
    // source file (src/backend/userpb.rs) rather than generated here,
    // because the build environment provides no `protoc`. Regenerate the
    // bindings with tonic-build if proto/user.proto changes.
    println!("cargo:rerun-if-changed=proto/user.proto");
}
