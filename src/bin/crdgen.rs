use kiln::crd::{Build, Builder, Image};
use kube::CustomResourceExt;

fn main() {
    for crd in [Image::crd(), Build::crd(), Builder::crd()] {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd).unwrap());
    }
}
