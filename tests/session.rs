mod common;

use common::{capture_logs, small_table, MockAgent};
use nf_agent_rust::console::{ReadOutcome, ScriptedReader};
use nf_agent_rust::models::TerminationReason;
use nf_agent_rust::service::session::FAILURE_MESSAGE;
use nf_agent_rust::{AgentBridge, QueryLoop};
use std::future::pending;
use std::time::Duration;
use tracing::Level;

fn bridge(agent: MockAgent) -> AgentBridge {
    AgentBridge::new(Box::new(agent), small_table(), 100, false).unwrap()
}

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn exit_tokens_terminate_without_agent_call() {
    for token in ["sair", " EXIT ", "Sair"] {
        let (agent, calls) = MockAgent::new();
        let bridge = bridge(agent);
        let mut reader = ScriptedReader::new([token, "never asked"]);
        let mut out = Vec::new();

        let summary = QueryLoop::new(&bridge)
            .run(&mut reader, &mut out, pending())
            .await
            .unwrap();

        assert_eq!(summary.reason, TerminationReason::ExitCommand, "token {token:?}");
        assert_eq!(summary.answered, 0);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(reader.prompts(), 1);
        assert!(out.is_empty());
    }
}

#[tokio::test]
async fn answers_are_printed_one_per_query() {
    let (agent, calls) = MockAgent::new();
    let bridge = bridge(agent);
    let mut reader = ScriptedReader::new(["  qual o total?  ", "", "quantos produtos?", "sair"]);
    let mut out = Vec::new();

    let summary = QueryLoop::new(&bridge)
        .run(&mut reader, &mut out, pending())
        .await
        .unwrap();

    assert_eq!(summary.answered, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["qual o total?".to_string(), "quantos produtos?".to_string()]
    );
    assert_eq!(
        output(out),
        "2 linhas: qual o total?\n2 linhas: quantos produtos?\n"
    );
}

#[tokio::test]
async fn failing_query_keeps_session_running() {
    let (logs, _guard) = capture_logs();
    let (agent, calls) = MockAgent::new();
    let bridge = bridge(agent.failing_on("quebra"));
    let mut reader = ScriptedReader::new(["isso quebra", "pergunta normal", "exit"]);
    let mut out = Vec::new();

    let summary = QueryLoop::new(&bridge)
        .run(&mut reader, &mut out, pending())
        .await
        .unwrap();

    assert_eq!(summary.reason, TerminationReason::ExitCommand);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.answered, 1);
    assert_eq!(calls.lock().unwrap().len(), 2);

    let printed = output(out);
    let lines: Vec<&str> = printed.lines().collect();
    assert_eq!(lines, vec![FAILURE_MESSAGE, "2 linhas: pergunta normal"]);
    assert!(!printed.contains("boom"));
    assert!(logs.has_event(Level::ERROR, "query execution failed"));
}

#[tokio::test]
async fn interrupt_at_prompt_terminates() {
    let (agent, calls) = MockAgent::new();
    let bridge = bridge(agent);
    let mut reader = ScriptedReader::from_outcomes([ReadOutcome::Interrupted]);
    let mut out = Vec::new();

    let summary = QueryLoop::new(&bridge)
        .run(&mut reader, &mut out, pending())
        .await
        .unwrap();

    assert_eq!(summary.reason, TerminationReason::Interrupted);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn interrupt_fired_before_first_read_terminates() {
    let (agent, calls) = MockAgent::new();
    let bridge = bridge(agent);
    let mut reader = ScriptedReader::new(["nunca lida"]);
    let mut out = Vec::new();

    let summary = QueryLoop::new(&bridge)
        .run(&mut reader, &mut out, std::future::ready(()))
        .await
        .unwrap();

    assert_eq!(summary.reason, TerminationReason::Interrupted);
    assert_eq!(reader.prompts(), 0);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn interrupt_during_read_discards_line() {
    let (agent, calls) = MockAgent::new();
    let bridge = bridge(agent);
    let mut reader = ScriptedReader::new(["pergunta", "outra"]);
    let mut out = Vec::new();
    let fired = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));

    // 第一次轮询未触发，之后视为已到达
    let polls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let interrupt = std::future::poll_fn({
        let polls = polls.clone();
        let fired = fired.clone();
        move |_cx| {
            if polls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                std::task::Poll::Pending
            } else {
                fired.store(true, std::sync::atomic::Ordering::SeqCst);
                std::task::Poll::Ready(())
            }
        }
    });

    let summary = QueryLoop::new(&bridge)
        .run(&mut reader, &mut out, interrupt)
        .await
        .unwrap();

    assert_eq!(summary.reason, TerminationReason::Interrupted);
    assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
    assert_eq!(reader.prompts(), 1);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn interrupt_cancels_hung_agent_call() {
    let (agent, calls) = MockAgent::new();
    let bridge = bridge(agent.hanging_on("lenta"));
    let mut reader = ScriptedReader::new(["pergunta lenta", "nunca lida"]);
    let mut out = Vec::new();

    let summary = QueryLoop::new(&bridge)
        .run(
            &mut reader,
            &mut out,
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await
        .unwrap();

    assert_eq!(summary.reason, TerminationReason::Interrupted);
    assert_eq!(summary.answered, 0);
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(reader.prompts(), 1);
    assert!(out.is_empty());
}

#[tokio::test]
async fn end_of_input_terminates() {
    let (agent, _calls) = MockAgent::new();
    let bridge = bridge(agent);
    let mut reader = ScriptedReader::new(["uma pergunta"]);
    let mut out = Vec::new();

    let summary = QueryLoop::new(&bridge)
        .run(&mut reader, &mut out, pending())
        .await
        .unwrap();

    assert_eq!(summary.reason, TerminationReason::EndOfInput);
    assert_eq!(summary.answered, 1);
}

#[tokio::test]
async fn finalization_is_logged_exactly_once() {
    let cases: Vec<Vec<ReadOutcome>> = vec![
        vec![ReadOutcome::Line("sair".into())],
        vec![ReadOutcome::Interrupted],
        vec![ReadOutcome::Line("a".into()), ReadOutcome::Eof],
    ];

    for outcomes in cases {
        let (logs, _guard) = capture_logs();
        let (agent, _calls) = MockAgent::new();
        let bridge = bridge(agent);
        let mut reader = ScriptedReader::from_outcomes(outcomes);
        let mut out = Vec::new();

        QueryLoop::new(&bridge)
            .run(&mut reader, &mut out, pending())
            .await
            .unwrap();

        assert_eq!(logs.count_message("application finished"), 1);
    }
}

/// 输出失败时循环以错误返回，收尾日志仍然输出一次
#[tokio::test]
async fn finalization_runs_when_loop_errors() {
    struct BrokenPipe;

    impl std::io::Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let (logs, _guard) = capture_logs();
    let (agent, _calls) = MockAgent::new();
    let bridge = bridge(agent);
    let mut reader = ScriptedReader::new(["pergunta", "sair"]);

    let result = QueryLoop::new(&bridge)
        .run(&mut reader, &mut BrokenPipe, pending())
        .await;

    assert!(result.is_err());
    assert_eq!(logs.count_message("application finished"), 1);
}
