//! End-to-end tests for the Ripple compiler CLI.
//!
//! Each test writes a `.rpl` source file, drives the built `ripplec`
//! binary, and checks the generated output or the reported failure.

use std::path::PathBuf;
use std::process::{Command, Output};

const BFS: &str = "element Vertex end\n\
    element Edge end\n\
    const edges : edgeset{Edge}(Vertex, Vertex) = load (\"graph.el\");\n\
    const parent : vector{Vertex}(int) = -1;\n\
    func updateEdge(src : Vertex, dst : Vertex)\n\
        parent[dst] min= parent[src];\n\
    end\n\
    func main()\n\
        var frontier : vertexset{Vertex} = new vertexset{Vertex}(0);\n\
        #s1# frontier = edges.from(frontier).applyModified(updateEdge, parent, true);\n\
    end\n";

fn ripplec() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ripplec"))
}

fn write_program(dir: &tempfile::TempDir, source: &str) -> PathBuf {
    let path = dir.path().join("program.rpl");
    std::fs::write(&path, source).expect("failed to write source file");
    path
}

fn run(args: &[&str]) -> Output {
    ripplec()
        .args(args)
        .output()
        .expect("failed to invoke ripplec")
}

#[test]
fn build_generates_gpu_source() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(&dir, BFS);
    let out_path = dir.path().join("program.cu");

    let output = run(&[
        "build",
        program.to_str().unwrap(),
        "--module-name",
        "bfs",
        "-o",
        out_path.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "ripplec build failed:\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let generated = std::fs::read_to_string(&out_path).expect("output file written");
    assert!(generated.contains("__global__ void bfs_kernel_1("));
    assert!(generated.contains("void __device__ bfs_updateEdge(int32_t src, int32_t dst) {"));
    assert!(generated.contains("void __host__ bfs_main() {"));
    assert!(generated.contains("cudaDeviceSynchronize();"));
    // Default direction is push.
    assert!(generated.contains("graph.row_offsets[src]"));
}

#[test]
fn direction_flag_switches_to_pull() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(&dir, BFS);
    let out_path = dir.path().join("program.cu");

    let output = run(&[
        "build",
        program.to_str().unwrap(),
        "--direction",
        "s1=pull",
        "-o",
        out_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let generated = std::fs::read_to_string(&out_path).unwrap();
    assert!(generated.contains("graph.col_offsets[dst]"));
    assert!(generated.contains("ripple::in_frontier(frontier, src)"));
}

#[test]
fn check_reports_parse_errors_with_location() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(&dir, "func main() var x = ; end\n");

    let output = run(&["check", program.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Parse error"), "stderr: {stderr}");
}

#[test]
fn check_accepts_valid_program() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(&dir, BFS);

    let output = run(&["check", program.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn build_rejects_missing_file() {
    let output = run(&["build", "/nonexistent/program.rpl"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {stderr}");
}
