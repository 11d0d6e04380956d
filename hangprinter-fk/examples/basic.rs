//! A basic example for how to use the forward kinematics solver.
use hangprinter_fk::{Config, FlexConfig, LineConfig, Machine};

fn main() {
    // Describe the machine.
    // Three anchors low down around the edge of the room, one in the ceiling.
    let anchors = [
        [0.0, -1620.0, -150.0],
        [1400.0, 810.0, -150.0],
        [-1400.0, 810.0, -150.0],
        [0.0, 0.0, 2300.0],
    ];
    // The ceiling line goes through a 4:1 pulley block, the others 2:1.
    let low = LineConfig::default();
    let lines = [low, low, low, low.with_mechanical_advantage(4.0)];
    let machine = match Machine::new(&anchors, &lines, FlexConfig::default(), 3200.0) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Invalid machine: {e}");
            return;
        }
    };

    // Pretend the motors report these positions.
    let motor_positions = machine.inverse_transform([250.0, -100.0, 600.0]);
    println!("Motor positions: {:?}", motor_positions.as_slice());

    // Run the solver!
    let outcome = machine.forward_transform(&motor_positions, [0.0; 3], &Config::default());

    // Check the outcome.
    match outcome {
        Ok(result) if result.converged => {
            let [x, y, z] = result.position;
            println!("Effector at ({x:.3}, {y:.3}, {z:.3}) after {} iterations", result.iterations);
        }
        Ok(result) => {
            eprintln!("Solver gave up: {result}");
        }
        Err(e) => {
            eprintln!("Could not solve: {e}");
        }
    }
}
