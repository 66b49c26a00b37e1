use std::sync::{Arc, Mutex};

use agent_adapters::scripted::{ScriptedAdapter, ScriptedReply};
use agent_kernel::{Agent, FINAL_ANSWER_INSTRUCTION, KernelError};
use agent_primitives::{
    CapabilityDescriptor, MessageRole, ParameterSpec, ParameterType, PromptMessage,
};
use agent_telemetry::{AgentEvent, CollectingSink, ToolOutcome};
use agent_tools::{Capability, FnCapability, NO_CAPABILITIES, Parameters, ToolError};
use serde_json::{Value, json};

fn calculator_add() -> Arc<dyn Capability> {
    let descriptor = CapabilityDescriptor::builder("calculator_add")
        .description("Adds two numbers")
        .parameter(ParameterSpec::required("a", ParameterType::Number, "first addend"))
        .parameter(ParameterSpec::required("b", ParameterType::Number, "second addend"))
        .build()
        .unwrap();
    FnCapability::new(descriptor, |params: Parameters| async move {
        let a = params.get("a").and_then(Value::as_f64).unwrap_or_default();
        let b = params.get("b").and_then(Value::as_f64).unwrap_or_default();
        Ok::<_, ToolError>(format!("{}", a + b))
    })
    .shared()
}

fn recorder(seen: Arc<Mutex<Vec<Parameters>>>) -> Arc<dyn Capability> {
    let descriptor = CapabilityDescriptor::builder("record")
        .description("Records its parameters")
        .parameter(ParameterSpec::required("a", ParameterType::Integer, "count"))
        .parameter(ParameterSpec::optional("b", ParameterType::Boolean, "flag"))
        .build()
        .unwrap();
    FnCapability::new(descriptor, move |params: Parameters| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock().expect("recorder poisoned").push(params);
            Ok::<_, ToolError>("recorded".to_owned())
        }
    })
    .shared()
}

fn failing() -> Arc<dyn Capability> {
    let descriptor = CapabilityDescriptor::builder("flaky")
        .description("Always fails")
        .build()
        .unwrap();
    FnCapability::new(descriptor, |_: Parameters| async move {
        Err::<String, _>(ToolError::execution("backend unavailable"))
    })
    .shared()
}

fn panicking() -> Arc<dyn Capability> {
    let descriptor = CapabilityDescriptor::builder("boom")
        .description("Indexes past the end of an empty list")
        .build()
        .unwrap();
    FnCapability::new(descriptor, |params: Parameters| async move {
        let values: Vec<u32> = Vec::new();
        let index = params.len() + 2;
        Ok::<_, ToolError>(values[index].to_string())
    })
    .shared()
}

fn agent_with(adapter: &Arc<ScriptedAdapter>, sink: &Arc<CollectingSink>) -> Agent {
    Agent::builder(adapter.clone())
        .system_prompt("You are a test assistant.")
        .event_sink(sink.clone())
        .build()
}

fn last_user_message(messages: &[PromptMessage]) -> &str {
    messages
        .iter()
        .rev()
        .find(|message| message.role() == MessageRole::User)
        .map(PromptMessage::content)
        .unwrap()
}

#[tokio::test]
async fn directive_free_reply_is_final_after_one_call() {
    let adapter = Arc::new(ScriptedAdapter::new(["hello"]));
    let sink = CollectingSink::new();
    let mut agent = agent_with(&adapter, &sink);

    let answer = agent.run("hi").await.unwrap();

    assert_eq!(answer, "hello");
    assert_eq!(adapter.calls(), 1);
    assert_eq!(
        agent.history().snapshot(),
        [PromptMessage::user("hi"), PromptMessage::assistant("hello")]
    );
    assert!(sink.drain().contains(&AgentEvent::TurnCompleted {
        model_calls: 1,
        tool_calls: 0,
    }));
}

#[tokio::test]
async fn tool_result_is_fed_back_to_the_model() {
    let adapter = Arc::new(ScriptedAdapter::new([
        "Let me add. [TOOL_CALL:calculator_add:a=2,b=3]",
        "The sum is 5.",
    ]));
    let sink = CollectingSink::new();
    let mut agent = agent_with(&adapter, &sink);
    agent.add_capability(calculator_add());

    let answer = agent.run("What is 2 + 3?").await.unwrap();
    assert_eq!(answer, "The sum is 5.");

    let requests = adapter.requests();
    assert_eq!(requests.len(), 2);

    let second = requests[1].messages();
    let feedback = last_user_message(second);
    assert!(feedback.contains("Tool calculator_add result:\n5"));
    assert!(feedback.ends_with(FINAL_ANSWER_INSTRUCTION));

    let assistant = &second[second.len() - 2];
    assert_eq!(assistant.role(), MessageRole::Assistant);
    assert_eq!(assistant.content(), "Let me add. ");

    assert_eq!(
        agent.history().snapshot(),
        [
            PromptMessage::user("What is 2 + 3?"),
            PromptMessage::assistant("The sum is 5."),
        ]
    );
}

#[tokio::test]
async fn parameters_are_coerced_to_declared_types() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let adapter = Arc::new(ScriptedAdapter::new(["[TOOL_CALL:record:a=1,b=true]", "done"]));
    let sink = CollectingSink::new();
    let mut agent = agent_with(&adapter, &sink);
    agent.add_capability(recorder(Arc::clone(&seen)));

    agent.run("record something").await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].get("a"), Some(&json!(1)));
    assert_eq!(seen[0].get("b"), Some(&json!(true)));
}

#[tokio::test]
async fn unknown_and_failing_tools_are_contained() {
    let adapter = Arc::new(ScriptedAdapter::new([
        "[TOOL_CALL:missing:x=1] and [TOOL_CALL:flaky:now=yes]",
        "Sorry, the tools did not work.",
    ]));
    let sink = CollectingSink::new();
    let mut agent = agent_with(&adapter, &sink);
    agent.add_capability(failing());

    let answer = agent.run("try the tools").await.unwrap();
    assert_eq!(answer, "Sorry, the tools did not work.");

    let requests = adapter.requests();
    let feedback = last_user_message(requests[1].messages());
    assert!(feedback.starts_with(
        "Error: tool missing not found\n\nTool flaky invocation failed: backend unavailable"
    ));

    let outcomes: Vec<ToolOutcome> = sink
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            AgentEvent::ToolDispatched { outcome, .. } => Some(outcome),
            _ => None,
        })
        .collect();
    assert_eq!(
        outcomes,
        [
            ToolOutcome::NotFound,
            ToolOutcome::Failed {
                reason: "backend unavailable".into()
            }
        ]
    );
}

#[tokio::test]
async fn panicking_tool_does_not_abort_the_turn() {
    let adapter = Arc::new(ScriptedAdapter::new(["[TOOL_CALL:boom:x=1]", "recovered"]));
    let sink = CollectingSink::new();
    let mut agent = agent_with(&adapter, &sink);
    agent.add_capability(panicking());

    let answer = agent.run("trigger the bug").await.unwrap();
    assert_eq!(answer, "recovered");
    assert_eq!(adapter.calls(), 2);

    let requests = adapter.requests();
    let feedback = last_user_message(requests[1].messages());
    assert!(feedback.starts_with("Tool boom invocation failed: tool panicked: "));
    assert_eq!(
        agent.history().snapshot(),
        [
            PromptMessage::user("trigger the bug"),
            PromptMessage::assistant("recovered"),
        ]
    );
}

#[tokio::test]
async fn iteration_bound_forces_final_answer() {
    let adapter = Arc::new(ScriptedAdapter::repeating("[TOOL_CALL:calculator_add:a=1,b=1]"));
    let sink = CollectingSink::new();
    let mut agent = Agent::builder(adapter.clone())
        .max_iterations(3)
        .event_sink(sink.clone())
        .build();
    agent.add_capability(calculator_add());

    let answer = agent.run("loop forever").await.unwrap();

    assert_eq!(adapter.calls(), 4);
    assert_eq!(answer, "[TOOL_CALL:calculator_add:a=1,b=1]");
    assert_eq!(agent.history().len(), 2);

    let events = sink.drain();
    assert!(events.contains(&AgentEvent::IterationLimitReached { max_iterations: 3 }));
    assert!(events.contains(&AgentEvent::ModelCalled {
        round: 4,
        forced: true,
        streaming: false,
    }));
    assert!(events.contains(&AgentEvent::TurnCompleted {
        model_calls: 4,
        tool_calls: 3,
    }));
}

#[tokio::test]
async fn system_prompt_lists_registered_tools() {
    let adapter = Arc::new(ScriptedAdapter::repeating("ok"));
    let sink = CollectingSink::new();
    let mut agent = agent_with(&adapter, &sink);

    agent.run("first").await.unwrap();
    agent.add_capability(calculator_add());
    agent.run("second").await.unwrap();

    let requests = adapter.requests();
    let bare = requests[0].messages()[0].content();
    assert_eq!(bare, "You are a test assistant.");

    let with_tools = requests[1].messages()[0].content();
    assert!(with_tools.starts_with("You are a test assistant."));
    assert!(with_tools.contains("calculator_add: Adds two numbers"));
    assert!(with_tools.contains("[TOOL_CALL:{tool_name}:{parameters}]"));

    let describe = agent.registry().describe_all();
    assert_eq!(describe, agent.registry().describe_all());
    assert_ne!(describe, NO_CAPABILITIES);
}

#[tokio::test]
async fn history_is_replayed_on_the_next_call() {
    let adapter = Arc::new(ScriptedAdapter::new(["hello", "again"]));
    let sink = CollectingSink::new();
    let mut agent = agent_with(&adapter, &sink);

    agent.run("hi").await.unwrap();
    agent.run("and now?").await.unwrap();

    let second = adapter.requests()[1].messages().to_vec();
    assert_eq!(
        &second[1..],
        [
            PromptMessage::user("hi"),
            PromptMessage::assistant("hello"),
            PromptMessage::user("and now?"),
        ]
    );
    assert_eq!(agent.history().len(), 4);

    agent.clear_history();
    assert!(agent.history().is_empty());
}

#[tokio::test]
async fn transport_failure_propagates_without_touching_history() {
    let adapter = Arc::new(ScriptedAdapter::from_script([ScriptedReply::TransportFailure(
        "connection reset".into(),
    )]));
    let sink = CollectingSink::new();
    let mut agent = agent_with(&adapter, &sink);

    let err = agent.run("hi").await.unwrap_err();

    assert!(err.is_transport());
    assert!(matches!(err, KernelError::Transport { .. }));
    assert!(agent.history().is_empty());
    assert!(sink.drain().iter().any(|event| matches!(
        event,
        AgentEvent::TransportFailed { reason } if reason.contains("connection reset")
    )));
}
