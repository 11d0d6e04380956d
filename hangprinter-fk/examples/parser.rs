//! Parse a firmware-style machine configuration,
//! then track the effector as it moves.
use hangprinter_fk::{Config, MachineDescription};
use std::str::FromStr;

fn main() {
    let file = "\
; anchors
M669 K6 P5 A0:-2000:-120 B2000:0:-120 C0:2000:-120 D-2000:0:-120 E0:0:2000
; spools and flex
M666 U2:2:2:2:4 J9000 W2 S20000
";
    let description = MachineDescription::from_str(file).unwrap();
    let machine = description.to_machine().unwrap();

    // Each solve starts from where the last one ended up.
    let mut seed = [0.0; 3];
    for k in 0u32..5 {
        let k = f64::from(k);
        let target = [100.0 * k, -20.0 * k, 50.0 * k];
        let steps = machine.inverse_transform(target);
        let result = machine
            .forward_transform(&steps, seed, &Config::default())
            .unwrap();
        assert!(result.converged);
        println!("{target:?} -> {result}");
        seed = result.position;
    }
}
