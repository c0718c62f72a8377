mod doubles;
mod rag_flow;
