mod huffman_properties;
mod top_dag_properties;
