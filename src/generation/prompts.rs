/// System instruction shared by both backends.
pub const SYSTEM_PROMPT: &str = "Você é um elaborador de provas de concursos públicos brasileiros. \
Responda APENAS com JSON válido, sem comentários e sem texto fora do JSON.";

/// Builds the user prompt asking for `count` questions about `exam_name`.
pub fn question_batch_prompt(exam_name: &str, count: usize) -> String {
    format!(
        r#"Gere {count} questões de múltipla escolha para o concurso público: {exam_name}

Cada questão deve ter:
- Uma pergunta clara e objetiva
- Exatamente 4 alternativas (A, B, C, D)
- Uma única resposta correta, indicada pelo índice da alternativa (0 a 3)
- Uma explicação detalhada do porquê a resposta está correta

Formato de resposta (JSON):
[
  {{
    "question": "Pergunta aqui",
    "options": ["Alternativa A", "Alternativa B", "Alternativa C", "Alternativa D"],
    "correctAnswer": 0,
    "explanation": "Explicação detalhada aqui"
  }}
]

As questões devem ser relevantes para o concurso público brasileiro e seguir o padrão das bancas."#
    )
}
