// End-to-end wire-protocol conformance: runs a full plan through a
// `PlotSupervisor` wired to a recording mock EBB and inspects the exact
// command stream it produced.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use ebb_plotter::device::{AccelerationProfile, Device, Hardware, ToolingProfile};
    use ebb_plotter::ebb::EbbDriver;
    use ebb_plotter::events::Event;
    use ebb_plotter::motion::build_plan;
    use ebb_plotter::supervisor::PlotSupervisor;
    use ebb_plotter::vec2::Vec2;
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufStream};

    fn tooling() -> ToolingProfile {
        let profile = AccelerationProfile { acceleration: 1000.0, max_velocity: 250.0, cornering_factor: 0.635 };
        ToolingProfile {
            pen_down_profile: profile,
            pen_up_profile: profile,
            pen_down_pos: 21000,
            pen_up_pos: 34500,
            pen_lift_duration: 0.15,
            pen_drop_duration: 0.12,
        }
    }

    fn device() -> Device {
        Device::new(5, 21000, 34500, Hardware::V3)
    }

    /// Answers `V` with a firmware version and everything else with `OK`,
    /// recording every command line it receives in arrival order.
    async fn recording_ebb(mut peer: tokio::io::DuplexStream, firmware: &'static str, log: Arc<Mutex<Vec<String>>>) {
        let mut io = BufStream::new(&mut peer);
        loop {
            let mut line = String::new();
            if io.read_line(&mut line).await.unwrap_or(0) == 0 {
                break;
            }
            let line = line.trim().to_string();
            log.lock().unwrap().push(line.clone());
            let reply = if line.starts_with('V') { format!("{firmware}\r\n") } else { "OK\r\n".to_string() };
            if io.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
            let _ = io.flush().await;
        }
    }

    async fn run_to_completion(supervisor: &PlotSupervisor<tokio::io::DuplexStream>) {
        let mut events = supervisor.subscribe();
        for _ in 0..200 {
            match tokio::time::timeout(std::time::Duration::from_secs(2), events.recv()).await {
                Ok(Ok(Event::Finished)) | Ok(Ok(Event::Cancelled)) => return,
                Ok(Ok(_)) => continue,
                _ => return,
            }
        }
    }

    #[tokio::test]
    async fn stream_opens_with_enable_motors_and_closes_with_servo_power_off() {
        let (client, server) = duplex(8192);
        let log = Arc::new(Mutex::new(Vec::new()));
        tokio::spawn(recording_ebb(server, "EBB Firmware Version 2.7.0", log.clone()));

        let supervisor = PlotSupervisor::new(EbbDriver::new(client), device(), tooling());
        let plan = build_plan(&[vec![Vec2::new(0.0, 0.0), Vec2::new(50.0, 0.0)]], &tooling(), Vec2::ZERO).unwrap();
        supervisor.submit(plan).unwrap();
        run_to_completion(&supervisor).await;

        let commands = log.lock().unwrap().clone();
        assert_eq!(commands.first().map(String::as_str), Some("V"));
        assert!(commands.iter().any(|c| c == "EM,1,1"), "expected EM,1,1 to enable motors: {commands:?}");
        assert_eq!(commands.last().map(String::as_str), Some("SR,60000000,0"));
    }

    #[tokio::test]
    async fn lm_capable_firmware_drives_the_carriage_with_lm() {
        let (client, server) = duplex(8192);
        let log = Arc::new(Mutex::new(Vec::new()));
        tokio::spawn(recording_ebb(server, "EBB Firmware Version 2.7.0", log.clone()));

        let supervisor = PlotSupervisor::new(EbbDriver::new(client), device(), tooling());
        let plan = build_plan(&[vec![Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)]], &tooling(), Vec2::ZERO).unwrap();
        supervisor.submit(plan).unwrap();
        run_to_completion(&supervisor).await;

        let commands = log.lock().unwrap().clone();
        assert!(commands.iter().any(|c| c.starts_with("LM,")), "expected an LM move: {commands:?}");
    }

    #[tokio::test]
    async fn pre_25_firmware_falls_back_to_xm() {
        let (client, server) = duplex(8192);
        let log = Arc::new(Mutex::new(Vec::new()));
        tokio::spawn(recording_ebb(server, "EBB Firmware Version 2.4.0", log.clone()));

        let supervisor = PlotSupervisor::new(EbbDriver::new(client), device(), tooling());
        let plan = build_plan(&[vec![Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)]], &tooling(), Vec2::ZERO).unwrap();
        supervisor.submit(plan).unwrap();
        run_to_completion(&supervisor).await;

        let commands = log.lock().unwrap().clone();
        assert!(!commands.iter().any(|c| c.starts_with("LM,")));
        assert!(commands.iter().any(|c| c.starts_with("XM,")), "expected an XM move: {commands:?}");
        // Pre-2.6.0 firmware has no SR support, so the plot must end with a blunt EM,0,0.
        assert_eq!(commands.last().map(String::as_str), Some("EM,0,0"));
    }
}
